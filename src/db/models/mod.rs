mod creator;
mod product;
mod session;

pub use creator::*;
pub use product::*;
pub use session::*;
