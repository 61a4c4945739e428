pub mod event;
pub mod requests;
pub mod responses;
pub mod session;
pub mod settings;
pub mod step;

pub use event::*;
pub use requests::*;
pub use responses::*;
pub use session::*;
pub use settings::*;
pub use step::*;
