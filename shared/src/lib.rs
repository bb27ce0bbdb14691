pub mod protocol;
pub mod stats;
pub mod items;
pub mod entities;
pub mod content;
pub mod defaults;

pub use protocol::*;
pub use stats::*;
pub use items::*;
pub use entities::*;
pub use content::*;
pub use defaults::*;
