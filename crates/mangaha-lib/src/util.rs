/// Returns the extension of the last path segment of `url`, without the dot.
///
/// Query string and fragment are ignored, and everything after the first dot of
/// the file name is returned, so `archive.tar.gz` gives `tar.gz`. Directory urls
/// and file names without a dot give an empty string.
pub fn get_extension(url: &str) -> String {
    let url = url.split(['?', '#']).next().unwrap_or_default();
    let path = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);

    let filename = match path.split_once('/') {
        Some((_, path)) => path.rsplit('/').next().unwrap_or_default(),
        None if url.contains("://") => "",
        None => path,
    };

    filename
        .split_once('.')
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_extension() {
        assert_eq!(get_extension("https://example.com/a.png"), "png");
        assert_eq!(get_extension("https://example.com/a.jpg?x=1"), "jpg");
        assert_eq!(get_extension("https://example.com/dir/"), "");
        assert_eq!(get_extension(""), "");
        assert_eq!(get_extension("https://example.com/archive.tar.gz"), "tar.gz");
        assert_eq!(get_extension("https://example.com/file"), "");
    }

    #[test]
    fn test_get_extension_host_only() {
        assert_eq!(get_extension("https://example.com"), "");
        assert_eq!(get_extension("page_01.webp"), "webp");
    }
}
