pub mod book;
pub mod circulation;
pub mod commands;
pub mod damage;
pub mod errors;
pub mod fine;
pub mod member;
pub mod policy;
pub mod principal;
pub mod reservation;
pub mod suspension;
pub mod value_objects;

pub use book::*;
pub use circulation::*;
pub use damage::*;
pub use errors::*;
pub use fine::*;
pub use member::*;
pub use policy::*;
pub use principal::*;
pub use reservation::*;
pub use suspension::*;
pub use value_objects::*;
