//! Where-clause operator catalogue: which operators are offered for which field types.
//!
//! The compiler in `where_clause` assumes the (operator, field type) pair was
//! picked from this table and does not re-check it.

use serde_json::Value;

use crate::enums::{FieldType, WhereOperator};
use crate::types::{FieldRef, WhereClause};
use crate::where_clause as render;

use FieldType::{Boolean, Keyword, Number, Text};

pub struct OperatorSpec {
  pub operator: WhereOperator,
  pub applicable: &'static [FieldType],
  pub label: &'static str,
  /// Builds the filter fragment for a selected field.
  pub render: fn(&FieldRef, &WhereClause) -> Value,
}

impl OperatorSpec {
  pub fn applies_to(&self, field_type: FieldType) -> bool {
    self.applicable.contains(&field_type)
  }
}

const ALL_TYPES: &[FieldType] = &[Number, Text, Keyword, Boolean];
const NUMBERS: &[FieldType] = &[Number];
const STRINGS: &[FieldType] = &[Text, Keyword];

/// Catalogue in display order.
pub static OPERATORS: [OperatorSpec; 14] = [
  OperatorSpec {
    operator: WhereOperator::Is,
    applicable: ALL_TYPES,
    label: "is",
    render: render::is,
  },
  OperatorSpec {
    operator: WhereOperator::IsNot,
    applicable: ALL_TYPES,
    label: "is not",
    render: render::is_not,
  },
  OperatorSpec {
    operator: WhereOperator::IsNull,
    applicable: ALL_TYPES,
    label: "is null",
    render: render::is_null,
  },
  OperatorSpec {
    operator: WhereOperator::IsNotNull,
    applicable: ALL_TYPES,
    label: "is not null",
    render: render::is_not_null,
  },
  OperatorSpec {
    operator: WhereOperator::IsGreater,
    applicable: NUMBERS,
    label: "is greater than",
    render: render::is_greater,
  },
  OperatorSpec {
    operator: WhereOperator::IsGreaterEqual,
    applicable: NUMBERS,
    label: "is greater than equal",
    render: render::is_greater_equal,
  },
  OperatorSpec {
    operator: WhereOperator::IsLess,
    applicable: NUMBERS,
    label: "is less than",
    render: render::is_less,
  },
  OperatorSpec {
    operator: WhereOperator::IsLessEqual,
    applicable: NUMBERS,
    label: "is less than equal",
    render: render::is_less_equal,
  },
  OperatorSpec {
    operator: WhereOperator::InRange,
    applicable: NUMBERS,
    label: "is in range",
    render: render::in_range,
  },
  OperatorSpec {
    operator: WhereOperator::NotInRange,
    applicable: NUMBERS,
    label: "is not in range",
    render: render::not_in_range,
  },
  OperatorSpec {
    operator: WhereOperator::StartsWith,
    applicable: STRINGS,
    label: "starts with",
    render: render::starts_with,
  },
  OperatorSpec {
    operator: WhereOperator::EndsWith,
    applicable: STRINGS,
    label: "ends with",
    render: render::ends_with,
  },
  OperatorSpec {
    operator: WhereOperator::Contains,
    applicable: STRINGS,
    label: "contains",
    render: render::contains,
  },
  OperatorSpec {
    operator: WhereOperator::DoesNotContain,
    applicable: STRINGS,
    label: "does not contain",
    render: render::does_not_contain,
  },
];

pub fn spec(operator: WhereOperator) -> &'static OperatorSpec {
  // One row per variant, in table order.
  let index = match operator {
    WhereOperator::Is => 0,
    WhereOperator::IsNot => 1,
    WhereOperator::IsNull => 2,
    WhereOperator::IsNotNull => 3,
    WhereOperator::IsGreater => 4,
    WhereOperator::IsGreaterEqual => 5,
    WhereOperator::IsLess => 6,
    WhereOperator::IsLessEqual => 7,
    WhereOperator::InRange => 8,
    WhereOperator::NotInRange => 9,
    WhereOperator::StartsWith => 10,
    WhereOperator::EndsWith => 11,
    WhereOperator::Contains => 12,
    WhereOperator::DoesNotContain => 13,
  };
  &OPERATORS[index]
}

/// Operators offered for a field type, in display order.
pub fn operators_for(field_type: FieldType) -> Vec<WhereOperator> {
  OPERATORS
    .iter()
    .filter(|s| s.applies_to(field_type))
    .map(|s| s.operator)
    .collect()
}

pub fn is_valid(operator: WhereOperator, field_type: FieldType) -> bool {
  spec(operator).applies_to(field_type)
}

pub fn is_range_operator(operator: WhereOperator) -> bool {
  operator.is_range()
}

pub fn is_null_operator(operator: WhereOperator) -> bool {
  operator.is_null_check()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_rows_match_their_index() {
    for row in OPERATORS.iter() {
      assert_eq!(spec(row.operator).operator, row.operator);
    }
  }

  #[test]
  fn number_fields_get_comparisons_and_ranges() {
    let ops = operators_for(Number);
    assert_eq!(ops.len(), 10);
    assert!(ops.contains(&WhereOperator::InRange));
    assert!(!ops.contains(&WhereOperator::Contains));
  }

  #[test]
  fn text_and_keyword_get_string_operators() {
    for t in [Text, Keyword] {
      let ops = operators_for(t);
      assert_eq!(ops.len(), 8);
      assert!(ops.contains(&WhereOperator::StartsWith));
      assert!(!ops.contains(&WhereOperator::IsGreater));
    }
  }

  #[test]
  fn boolean_fields_only_get_equality_and_null() {
    assert_eq!(
      operators_for(Boolean),
      vec![
        WhereOperator::Is,
        WhereOperator::IsNot,
        WhereOperator::IsNull,
        WhereOperator::IsNotNull
      ]
    );
  }

  #[test]
  fn classification_helpers() {
    assert!(is_range_operator(WhereOperator::NotInRange));
    assert!(!is_range_operator(WhereOperator::IsLess));
    assert!(is_null_operator(WhereOperator::IsNull));
    assert!(!is_valid(WhereOperator::EndsWith, Boolean));
  }
}
