extern crate hamcrest2;

use std::fmt;
use hamcrest2::core::{Matcher, MatchResult, success};

use crate::libs::parameters::parameters::{ParameterSet, ParameterValue};

#[derive(Clone)]
pub struct HasParameter {
    key: String,
    value: ParameterValue,
}

impl fmt::Display for HasParameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a parameter set with {} = {}", self.key, self.value)
    }
}

impl<'a> Matcher<&'a ParameterSet> for HasParameter {
    fn matches(&self, actual: &'a ParameterSet) -> MatchResult {
        match actual.get(&self.key) {
            None => Err(format!("{} is absent from {:?}", self.key, actual.keys())),
            Some(found) if found.same_as(&self.value) => success(),
            Some(found) => Err(format!("{} was {}", self.key, found)),
        }
    }
}

/// Creates matcher that checks a parameter set holds `key` with a loosely-equal `value`.
pub fn has_parameter<V: Into<ParameterValue>>(key: &str, value: V) -> HasParameter {
    HasParameter { key: key.to_string(), value: value.into() }
}

#[derive(Clone)]
pub struct LacksParameter {
    key: String,
}

impl fmt::Display for LacksParameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a parameter set without {}", self.key)
    }
}

impl<'a> Matcher<&'a ParameterSet> for LacksParameter {
    fn matches(&self, actual: &'a ParameterSet) -> MatchResult {
        match actual.get(&self.key) {
            None => success(),
            Some(found) => Err(format!("{} is present with {}", self.key, found)),
        }
    }
}

pub fn lacks_parameter(key: &str) -> LacksParameter {
    LacksParameter { key: key.to_string() }
}
