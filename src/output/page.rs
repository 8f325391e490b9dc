// Module page content
//
// Everything a renderer needs for one documentation page, with no markup.

use crate::analysis::{ClassRecord, FunctionRecord};
use crate::error::Result;
use serde::Serialize;

/// Content of one module page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModulePage {
    pub url: String,
    pub title: String,
    pub module_id: String,
    pub doc: Option<String>,
    pub functions: Vec<FunctionRecord>,
    pub classes: Vec<ClassRecord>,
}

impl ModulePage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Capitalize the first letter of every run of letters and lowercase the
/// rest: `source_code` becomes `Source_Code`
pub fn title_case(name: &str) -> String {
    let mut title = String::with_capacity(name.len());
    let mut in_word = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            if in_word {
                title.extend(c.to_lowercase());
            } else {
                title.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            title.push(c);
            in_word = false;
        }
    }
    title
}
