//! Page templates
//!
//! Every page is a body template rendered into the shared layout. Component
//! fragments arrive as pre-escaped HTML and are inserted with triple braces.

use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;
use serde_json::json;

pub const LAYOUT: &str = "layout";
pub const DASHBOARD: &str = "dashboard";
pub const ADMIN: &str = "admin";
pub const ERROR: &str = "error";

pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_template_string(LAYOUT, include_str!("./templates/layout.hbs"))?;
        registry.register_template_string(DASHBOARD, include_str!("./templates/dashboard.hbs"))?;
        registry.register_template_string(ADMIN, include_str!("./templates/admin.hbs"))?;
        registry.register_template_string(ERROR, include_str!("./templates/error.hbs"))?;
        Ok(Templates { registry })
    }

    /// Render `name` with `data` and wrap it in the layout
    pub fn page<T: Serialize>(
        &self,
        name: &str,
        title: &str,
        data: &T,
    ) -> Result<String, RenderError> {
        let body = self.registry.render(name, data)?;
        self.registry
            .render(LAYOUT, &json!({ "title": title, "body": body }))
    }

    /// Standalone error page
    pub fn error_page(&self, title: &str, message: &str) -> Result<String, RenderError> {
        self.page(ERROR, title, &json!({ "title": title, "message": message }))
    }
}
