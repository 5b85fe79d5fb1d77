pub mod auth;
pub mod google;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod oauth;
pub mod password;
