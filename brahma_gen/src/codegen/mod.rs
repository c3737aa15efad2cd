pub mod gotcha;
pub mod gotcha_gen;

pub use gotcha::{GotchaCodeGenerator, GotchaCodeGeneratorOptions};
pub use gotcha_gen::{GeneratedModule, Namespace};
