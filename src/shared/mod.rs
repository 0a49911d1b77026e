// This is free and unencumbered software released into the public domain.

mod background;
pub use background::*;

mod config;
pub use config::*;

mod controller;
pub use controller::*;

mod dispatch;
pub use dispatch::*;

pub mod drivers {
    #[cfg(all(feature = "android", target_os = "android"))]
    pub mod camera2;
}

mod error;
pub use error::*;

mod frame;
pub use frame::*;

mod open;
pub use open::*;

mod platform;
pub use platform::*;

mod state;
pub use state::*;
