//! Terminal stand-in for the page's result container.

use loanform_core::ResultContainer;

/// Prints every replacement of the container content to stdout, one per line.
pub struct StdoutContainer {
    id: String,
}

impl StdoutContainer {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl ResultContainer for StdoutContainer {
    fn id(&self) -> &str {
        &self.id
    }

    fn replace_inner_html(&self, html: &str) {
        println!("{html}");
    }
}
