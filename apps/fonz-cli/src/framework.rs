pub mod lookml;
pub mod validator;
