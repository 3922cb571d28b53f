mod batch;
mod media;
mod run;

pub use batch::*;
pub use media::*;
pub use run::*;
