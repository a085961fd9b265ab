//! Static catalog entries.
//!
//! Each crate declares its failures as `ErrDef` constants; the `code` is the
//! stable identifier clients and logs match on, the `title` is for humans.

use http::StatusCode;

use crate::problem::Problem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrDef {
    pub status: StatusCode,
    pub title: &'static str,
    /// `<crate>.<area>.<name>.v<N>`
    pub code: &'static str,
}

impl ErrDef {
    /// Instantiate this entry for one occurrence.
    #[inline]
    pub fn as_problem(&self, detail: impl Into<String>) -> Problem {
        Problem::new(self.status, self.title, detail).with_code(self.code)
    }

    /// Whether `problem` was produced from this entry.
    #[must_use]
    pub fn matches(&self, problem: &Problem) -> bool {
        problem.code == self.code
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const TAKEN: ErrDef = ErrDef {
        status: StatusCode::CONFLICT,
        title: "Conflict",
        code: "crudkit.test.taken.v1",
    };

    #[test]
    fn entry_fills_status_title_and_code() {
        let problem = TAKEN.as_problem("email already registered");
        assert_eq!(problem.status, StatusCode::CONFLICT);
        assert_eq!(problem.title, "Conflict");
        assert_eq!(problem.detail, "email already registered");
        assert!(TAKEN.matches(&problem));
    }

    #[test]
    fn other_codes_do_not_match() {
        let problem = Problem::new(StatusCode::CONFLICT, "Conflict", "x").with_code("elsewhere.v1");
        assert!(!TAKEN.matches(&problem));
    }
}
