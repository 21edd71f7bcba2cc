//! HTML pages shown to the buyer's browser after the gateway redirect.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

#[derive(Template)]
#[template(path = "redirect.html")]
pub struct RedirectPage<'a> {
    pub title: &'a str,
    pub message: &'a str,
    pub url: &'a str,
    pub delay_seconds: u32,
}

#[derive(Template)]
#[template(path = "message.html")]
pub struct MessagePage<'a> {
    pub title: &'a str,
    pub message: &'a str,
    pub detail: Option<&'a str>,
}

/// Render `template` with `status`; a template failure becomes a bare 500.
pub fn render<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_text_is_escaped() {
        let page = MessagePage {
            title: "Payment failed",
            message: "<script>alert(1)</script>",
            detail: Some("a & b"),
        };
        let html = page.render().unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b"));
    }

    #[test]
    fn redirect_page_has_meta_refresh() {
        let page = RedirectPage {
            title: "Payment received",
            message: "Thank you",
            url: "/user/orders",
            delay_seconds: 3,
        };
        let html = page.render().unwrap();
        assert!(html.contains(r#"content="3;url="#));
        assert!(html.contains("orders"));
    }
}
