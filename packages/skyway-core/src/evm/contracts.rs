//! Withdrawer contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings. Two call shapes
//! exist on chain: the native withdrawer contract carries the withdrawn
//! amount in the call value, while withdrawable ERC-20 tokens expose a
//! `withdraw` entry point that takes the amount as an argument and only the
//! fee in the call value.

use alloy::sol;

sol! {
    /// Withdrawer contract for the chain's native token.
    #[sol(rpc)]
    contract NativeWithdrawer {
        /// Withdraw native tokens to an IBC chain address.
        /// The call value must be `amount + fee`.
        function withdrawToIbcChain(string destinationChainAddress, string memo) external payable;
    }

    /// ERC-20 token with a built-in withdrawal entry point.
    #[sol(rpc)]
    contract WithdrawableErc20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);

        /// Withdraw tokens to an IBC chain address.
        /// The call value must be exactly the withdrawal fee.
        function withdraw(uint256 amount, string destinationChainAddress, string memo) external payable;
    }
}
