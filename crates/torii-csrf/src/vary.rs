use http::{header::VARY, HeaderMap, HeaderValue};

/// Add header names to the `Vary` header, keeping existing entries and their order
///
/// Names are compared case-insensitively, so patching twice with the same name is a no-op.
pub fn patch_vary_headers<I, N>(headers: &mut HeaderMap, new_headers: I)
where
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
{
    let mut vary_headers: Vec<String> = headers
        .get_all(VARY)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    for new_header in new_headers {
        let new_header = new_header.as_ref();
        if !vary_headers
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(new_header))
        {
            vary_headers.push(new_header.to_owned());
        }
    }

    if vary_headers.is_empty() {
        return;
    }

    match HeaderValue::from_str(&vary_headers.join(", ")) {
        Ok(value) => {
            headers.insert(VARY, value);
        }
        Err(error) => debug!(?error, "failed to construct vary header"),
    }
}
