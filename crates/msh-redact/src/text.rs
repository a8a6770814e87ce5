// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::uri::redact_uri;
use crate::EMAIL;

/// A `scheme://` run up to the next whitespace or quote.
static URI_TOKEN: Lazy<Option<Regex>> =
	Lazy::new(|| Regex::new(r#"(?i)[a-z][a-z0-9+.\-]*://[^\s"'`]*"#).ok());

static EMAIL_ADDRESS: Lazy<Option<Regex>> =
	Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").ok());

/// Scrubs credentialed URIs and e-mail addresses from free text.
///
/// Every embedded URI goes through [`redact_uri`], so userinfo is masked by
/// the same last-`@` rule as structured connection strings. URIs are handled
/// before e-mail addresses so that `mongodb://user@host.com` collapses to a
/// credentials placeholder rather than an e-mail placeholder.
pub fn redact_text(input: &str) -> Cow<'_, str> {
	if !input.contains('@') && !input.contains("://") {
		return Cow::Borrowed(input);
	}

	let scrubbed = match URI_TOKEN.as_ref() {
		Some(re) => re.replace_all(input, |caps: &regex::Captures<'_>| {
			redact_uri(&caps[0]).into_owned()
		}),
		None => Cow::Borrowed(input),
	};

	match EMAIL_ADDRESS.as_ref() {
		Some(re) if re.is_match(&scrubbed) => {
			Cow::Owned(re.replace_all(&scrubbed, EMAIL).into_owned())
		}
		_ => scrubbed,
	}
}
