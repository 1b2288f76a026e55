// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod debounce;
pub mod filters;
pub mod history;
pub mod ids;
pub mod listing;
pub mod model;
pub mod page;
pub mod query;

pub use debounce::*;
pub use filters::*;
pub use history::*;
pub use ids::*;
pub use listing::*;
pub use model::*;
pub use page::*;
pub use query::*;
