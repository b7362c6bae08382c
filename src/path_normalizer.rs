/**
 * Path Normalizer
 *
 * DESIGN DECISION: Pure string/segment manipulation, never touches the filesystem
 * WHY: The core never does on-disk ingestion (embedder's job); a normalizer
 * that `stat`s paths would smuggle in a dependency on the filesystem that the
 * rest of the design deliberately avoids
 *
 * REASONING CHAIN:
 * 1. Resolve only relative specifiers (`./`, `../`); bare package names are
 *    the caller's concern (CI keeps them verbatim, CD drops them)
 * 2. Collapse `.`/`..` segments exactly as a filesystem would, without
 *    asking the filesystem anything
 * 3. Default to `.js` when the resolved path has no extension; preserve the
 *    specifier's own extension when it's one of the recognized source kinds
 */

const RECOGNIZED_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs", "json", "vue"];

/// Resolves relative import specifiers against the importing file's path.
pub struct PathNormalizer;

impl PathNormalizer {
    /// Resolve `specifier` as imported by `importer_path`.
    ///
    /// Returns `None` for non-relative specifiers (bare package names) and
    /// for specifiers that resolve back to the importer itself.
    pub fn resolve(importer_path: &str, specifier: &str) -> Option<String> {
        if !Self::is_relative(specifier) {
            return None;
        }

        let mut segments: Vec<&str> = importer_path.split('/').collect();
        segments.pop(); // drop the importer's own file name, keep its directory

        for part in specifier.split('/') {
            match part {
                "." | "" => continue,
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }

        let mut resolved = segments.join("/");
        if !resolved.starts_with('/') {
            resolved = format!("/{}", resolved);
        }

        resolved = Self::apply_extension(&resolved, specifier);

        if resolved == importer_path {
            None
        } else {
            Some(resolved)
        }
    }

    fn is_relative(specifier: &str) -> bool {
        specifier.starts_with("./") || specifier.starts_with("../")
    }

    fn apply_extension(resolved: &str, original_specifier: &str) -> String {
        let specifier_ext = original_specifier.rsplit('.').next().filter(|ext| {
            *ext != original_specifier && RECOGNIZED_EXTENSIONS.contains(ext)
        });

        if let Some(ext) = specifier_ext {
            if resolved.ends_with(&format!(".{}", ext)) {
                return resolved.to_string();
            }
        }

        if Self::has_extension(resolved) {
            resolved.to_string()
        } else {
            format!("{}.js", resolved)
        }
    }

    fn has_extension(path: &str) -> bool {
        match path.rsplit('/').next() {
            Some(basename) => basename.contains('.') && !basename.starts_with('.'),
            None => false,
        }
    }
}
