pub mod assets;
pub mod renderer;

pub use assets::{AssetLoadError, Backdrop, load_background};
pub use renderer::Renderer;
