pub mod serve;
pub mod token;
pub mod user;


#[cfg(test)]
#[path = "token_test.rs"]
mod token_test;

#[cfg(test)]
#[path = "serve_test.rs"]
mod serve_test;
