pub mod interceptor;
pub mod poller;
pub mod recorder;
pub mod script;
pub mod selector;
pub mod step_recorder;

pub use interceptor::Interceptor;
pub use poller::Poller;
pub use recorder::{validate_start_url, BrowserRecorder};
pub use selector::{synthesize, SelectorSet};
pub use step_recorder::StepRecorder;
