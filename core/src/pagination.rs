//! Following pagination tokens from one response to the next request.
//!
//! An operation is paginated when it carries a
//! [`Paginator`](crate::operation::Paginator). After a successful
//! [`Request::send`], [`Request::next_page`] reads the output token out of
//! Data and writes it into a copy of Params at the input token path. Any
//! ambiguity (missing token, missing truncation flag) ends pagination.

use crate::error::Error;
use crate::path::{set_value_at_path, value_at_path, values_at_path};
use crate::payload::Payload;
use crate::reflect::Reflect;
use crate::request::Request;
use std::sync::Arc;

impl Request {
    fn next_page_tokens(&self) -> Vec<&dyn Reflect> {
        let Some(paginator) = &self.operation.paginator else {
            return Vec::new();
        };
        values_at_path(self.data.as_reflect(), &paginator.output_token).unwrap_or_default()
    }

    /// Returns true if the response carried a token for another page.
    #[must_use]
    pub fn has_next_page(&self) -> bool {
        !self.next_page_tokens().is_empty()
    }

    /// A new request for the page after this one, or `None` when done.
    ///
    /// When a truncation flag is configured, an absent flag or a boolean
    /// `false` ends pagination; any other value continues. The new request
    /// gets a copy of Params with the token written at the input token path,
    /// and a zero-valued Data of the same type.
    #[must_use]
    pub fn next_page(&self) -> Option<Self> {
        let tokens = self.next_page_tokens();
        let token = tokens.first()?;
        let paginator = self.operation.paginator.as_ref()?;

        if !paginator.truncation_token.is_empty() {
            let flags = values_at_path(self.data.as_reflect(), &paginator.truncation_token)?;
            let ended = flags
                .first()
                .and_then(|flag| flag.as_any().downcast_ref::<bool>())
                == Some(&false);
            if ended {
                tracing::debug!(operation = %self.operation.name, "Truncation flag is false, no more pages");
                return None;
            }
        }

        let mut next = Self::new(
            Arc::clone(&self.service),
            Arc::clone(&self.operation),
            self.params.clone_payload(),
            self.data.fresh(),
        );
        set_value_at_path(
            next.params.as_reflect_mut(),
            &paginator.input_token,
            token.clone_value(),
        );

        tracing::debug!(
            operation = %self.operation.name,
            input_token = %paginator.input_token,
            "Prepared next page"
        );
        Some(next)
    }

    /// Send this request and every following page.
    ///
    /// `callback` receives each page's Data and whether it is the last page;
    /// returning `false` stops early.
    ///
    /// # Errors
    ///
    /// Returns the first error of any page's [`Request::send`].
    pub fn each_page<F>(&mut self, mut callback: F) -> Result<(), Error>
    where
        F: FnMut(&dyn Payload, bool) -> bool,
    {
        self.send()?;
        let mut next = self.next_page();
        if !callback(&*self.data, next.is_none()) {
            return Ok(());
        }

        while let Some(mut page) = next {
            page.send()?;
            next = page.next_page();
            if !callback(&*page.data, next.is_none()) {
                break;
            }
        }
        Ok(())
    }

    /// Page size from Params at the limit token path, if configured and set
    #[must_use]
    pub fn page_limit(&self) -> Option<&dyn Reflect> {
        let paginator = self.operation.paginator.as_ref()?;
        if paginator.limit_token.is_empty() {
            return None;
        }
        value_at_path(self.params.as_reflect(), &paginator.limit_token)
    }
}
