mod handlers;
mod routes;
mod server;


pub use routes::build_router;
pub use server::HttpServer;
