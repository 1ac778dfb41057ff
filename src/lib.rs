pub mod ast;
pub mod bytecode;
pub mod cli;
pub mod client;
pub mod clientconfig;
pub mod convert;
pub mod error;
pub mod model;
pub mod objects;
pub mod package;
pub mod packet;
pub mod parser;
pub mod serializer;
pub mod token;
