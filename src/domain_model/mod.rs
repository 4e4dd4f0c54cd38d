mod credentials;
mod notice;
mod request;
mod response;

pub use credentials::*;
pub use notice::*;
pub use request::*;
pub use response::*;
