mod analyze_route;
mod api_error;
mod api_route;
mod default_route;
mod results_route;

pub use analyze_route::*;
pub use api_error::*;
pub use api_route::*;
pub use default_route::*;
pub use results_route::*;
