// Application assembly and HTTP serving.

pub mod app;
pub mod server;

pub use app::App;
pub use server::{HttpServer, Server};
