pub mod declarations;
pub mod diag;
pub mod emitter;
pub mod events;
pub mod mapping;
pub mod mappings;
pub mod outputs;
pub mod path;
pub mod provider;
pub mod queue;
pub mod reference;
pub mod render;
pub mod repair;
pub mod resolver;
pub mod schema;
pub mod serializer;
pub mod settings;
pub mod state;
pub mod template;
pub mod text;
pub mod traits;
pub mod value;
pub mod writer;
