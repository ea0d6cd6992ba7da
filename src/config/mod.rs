pub mod persona;

pub use persona::{ load_persona, PersonaContext };
