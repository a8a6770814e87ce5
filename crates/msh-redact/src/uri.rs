// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::borrow::Cow;

use crate::{CREDENTIALS, REDACTED};

/// Query options whose values are credentials in their own right.
const SENSITIVE_OPTIONS: &[&str] = &[
	"password",
	"tlscertificatekeyfilepassword",
	"sslpemkeypassword",
	"authmechanismproperties",
];

/// Masks credentials in a connection string.
///
/// The userinfo ends at the last `@` of the string, so a password containing
/// unescaped `/`, `?`, `#` or `@` is still masked as a whole. When only the
/// options carry an `@`, everything up to it is masked as well. Strings
/// without a `scheme://` prefix are returned unchanged.
pub fn redact_uri(uri: &str) -> Cow<'_, str> {
	let Some(scheme_end) = uri.find("://") else {
		return Cow::Borrowed(uri);
	};
	let authority_start = scheme_end + 3;
	let rest = &uri[authority_start..];

	let mut changed = false;
	let mut out = String::with_capacity(uri.len());
	out.push_str(&uri[..authority_start]);

	let after_userinfo = match rest.rfind('@') {
		Some(at) => {
			if &rest[..at] != CREDENTIALS {
				changed = true;
			}
			out.push_str(CREDENTIALS);
			out.push('@');
			&rest[at + 1..]
		}
		None => rest,
	};

	let (location, query) = match after_userinfo.split_once('?') {
		Some((location, query)) => (location, Some(query)),
		None => (after_userinfo, None),
	};
	out.push_str(location);

	if let Some(query) = query {
		out.push('?');
		for (i, pair) in query.split('&').enumerate() {
			if i > 0 {
				out.push('&');
			}
			match pair.split_once('=') {
				Some((name, value)) if is_sensitive_option(name) => {
					if value != REDACTED {
						changed = true;
					}
					out.push_str(name);
					out.push('=');
					out.push_str(REDACTED);
				}
				_ => out.push_str(pair),
			}
		}
	}

	if changed {
		Cow::Owned(out)
	} else {
		Cow::Borrowed(uri)
	}
}

fn is_sensitive_option(name: &str) -> bool {
	let lower = name.to_ascii_lowercase();
	SENSITIVE_OPTIONS.contains(&lower.as_str())
}
