/// Enumerates supported generator backend tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeneratorProvider {
    /// Local bridge endpoint, the system default.
    #[default]
    Bridge,
    /// Hosted messages API authenticated with an API key.
    Hosted,
    /// Deterministic in-process mock.
    Mock,
}

impl GeneratorProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            GeneratorProvider::Bridge => "bridge",
            GeneratorProvider::Hosted => "hosted",
            GeneratorProvider::Mock => "mock",
        }
    }

    /// Parses a provider tag, coercing anything outside the closed set to
    /// the default with a warning instead of failing resolution.
    pub fn parse_or_default(tag: Option<&str>) -> Self {
        let Some(raw) = tag.map(str::trim).filter(|value| !value.is_empty()) else {
            return GeneratorProvider::default();
        };
        match raw.to_ascii_lowercase().as_str() {
            "bridge" => GeneratorProvider::Bridge,
            "hosted" => GeneratorProvider::Hosted,
            "mock" => GeneratorProvider::Mock,
            other => {
                tracing::warn!(
                    provider = other,
                    "unrecognized generator provider; using '{}'",
                    GeneratorProvider::default().as_str()
                );
                GeneratorProvider::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GeneratorProvider;

    #[test]
    fn unit_parse_or_default_accepts_closed_set_case_insensitively() {
        assert_eq!(
            GeneratorProvider::parse_or_default(Some("Hosted")),
            GeneratorProvider::Hosted
        );
        assert_eq!(
            GeneratorProvider::parse_or_default(Some("MOCK")),
            GeneratorProvider::Mock
        );
        assert_eq!(
            GeneratorProvider::parse_or_default(Some(" bridge ")),
            GeneratorProvider::Bridge
        );
    }

    #[test]
    fn unit_parse_or_default_coerces_unknown_and_empty_tags() {
        assert_eq!(
            GeneratorProvider::parse_or_default(Some("claude-desktop")),
            GeneratorProvider::Bridge
        );
        assert_eq!(
            GeneratorProvider::parse_or_default(Some("")),
            GeneratorProvider::Bridge
        );
        assert_eq!(
            GeneratorProvider::parse_or_default(None),
            GeneratorProvider::Bridge
        );
    }
}
