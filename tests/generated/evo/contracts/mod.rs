pub mod token;
pub mod erc20;
pub mod pool;

pub use token::Token;
pub use erc20::ERC20;
pub use pool::Pool;
