use crate::constant::*;

/// A plain token read as a subcommand selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectorToken<'t> {
    /// `<family path>:<alternative>`
    Qualified {
        family: &'t str,
        alternative: &'t str,
    },
    /// `<alternative>`
    Bare(&'t str),
}

pub(crate) fn split_selector(token: &str) -> SelectorToken<'_> {
    match token.rsplit_once(SELECTOR_DELIMITER) {
        Some((family, alternative)) if !family.is_empty() && !alternative.is_empty() => {
            SelectorToken::Qualified {
                family,
                alternative,
            }
        }
        _ => SelectorToken::Bare(token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("adam", SelectorToken::Bare("adam"))]
    #[case("optimizer:adam", SelectorToken::Qualified { family: "optimizer", alternative: "adam" })]
    #[case("model.optimizer:adam", SelectorToken::Qualified { family: "model.optimizer", alternative: "adam" })]
    #[case(":adam", SelectorToken::Bare(":adam"))]
    #[case("optimizer:", SelectorToken::Bare("optimizer:"))]
    #[case("a:b:c", SelectorToken::Qualified { family: "a:b", alternative: "c" })]
    fn split(#[case] token: &str, #[case] expected: SelectorToken) {
        assert_eq!(split_selector(token), expected);
    }
}
