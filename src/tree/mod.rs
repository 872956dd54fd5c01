pub mod connectivity;
pub mod content;
mod types;
pub mod validate;

pub use connectivity::{Connected, ancestors, descendants, path_to};
pub use content::valuation_tree;
pub use types::*;
pub use validate::validate;

use crate::error::Result;

impl DecisionTree {
    /// The built-in valuation tree, validated.
    pub fn builtin() -> Result<Self> {
        let tree = valuation_tree();
        validate(&tree)?;
        Ok(tree)
    }
}
