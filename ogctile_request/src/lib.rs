//! Request pipeline (C6) and capabilities builder (C7): KVP/XML parsing, per-operation
//! validation against the catalogue, the `GetMap`/`GetTile` image-graph assembly, and the
//! invariant capabilities fragment splicer.

pub mod assembly;
pub mod capabilities;
pub mod dispatch;
pub mod exception;
pub mod kvp;
pub mod request;

pub use dispatch::{Response, dispatch};
pub use exception::{Service, ServiceException};
pub use kvp::ParamMap;
