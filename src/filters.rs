// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Default placeholder values for the standard formatting filters.
//!
//! Only the name → placeholder mapping matters to inference; the formatting
//! implementations themselves live in the hosting application. Placeholders
//! are representative formatted values, so an inferred context doubles as
//! realistic preview data.

use crate::lookup::MapLookup;
use crate::value::Value;

const STANDARD_DEFAULTS: &[(&str, &str)] = &[
    ("currency", "$0.00"),
    ("frac_currency", "$0.0000"),
    ("percent", "0%"),
    ("dec", "0.00"),
    ("floatformat", "0.00"),
    ("intformat", "0"),
    ("numformat", "0"),
    ("shortnumformat", "0.0"),
    ("millionformat", "0.0M"),
    ("dateformat", "01/31/2018"),
    ("datetimeformat", "01/31/2018T10:00:01"),
    ("timeformat", "10:00 am UTC"),
    ("timestamp", "1517392801"),
    ("prettytime", "5 minutes ago"),
    ("until", "1 hrs 30 min"),
    ("phoneformat", "(555) 555-5555"),
    ("mask", "xxxxx1234"),
    ("insert", "123-12-1234"),
    ("titlesecurity", "Example Title"),
    ("urlencode", ""),
    ("to_json", "{}"),
];

/// The standard filter-default table as a lookup.
pub fn standard_defaults() -> MapLookup {
    STANDARD_DEFAULTS
        .iter()
        .map(|(name, default)| (*name, Value::from(*default)))
        .collect()
}
