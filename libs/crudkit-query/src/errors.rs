//! Query error catalog: stable codes for every pre-query rejection.

use crudkit_errors::ErrDef;
use http::StatusCode;

pub const UNKNOWN_COLUMN: ErrDef = ErrDef {
    status: StatusCode::NOT_ACCEPTABLE,
    title: "Unknown Column",
    code: "crudkit.query.unknown_column.v1",
};

pub const MISSING_CONDITION: ErrDef = ErrDef {
    status: StatusCode::NOT_ACCEPTABLE,
    title: "Missing Condition",
    code: "crudkit.query.missing_condition.v1",
};

pub const AMBIGUOUS_CONDITION: ErrDef = ErrDef {
    status: StatusCode::NOT_ACCEPTABLE,
    title: "Ambiguous Condition",
    code: "crudkit.query.ambiguous_condition.v1",
};

pub const ORPHAN_CONDITION: ErrDef = ErrDef {
    status: StatusCode::NOT_ACCEPTABLE,
    title: "Orphan Condition",
    code: "crudkit.query.orphan_condition.v1",
};

pub const AMBIGUOUS_AGGREGATION: ErrDef = ErrDef {
    status: StatusCode::NOT_ACCEPTABLE,
    title: "Ambiguous Aggregation",
    code: "crudkit.query.ambiguous_aggregation.v1",
};

pub const EMPTY_GROUP_BY: ErrDef = ErrDef {
    status: StatusCode::NOT_ACCEPTABLE,
    title: "Empty Group By",
    code: "crudkit.query.empty_group_by.v1",
};

pub const INVALID_VALUE: ErrDef = ErrDef {
    status: StatusCode::NOT_ACCEPTABLE,
    title: "Invalid Value",
    code: "crudkit.query.invalid_value.v1",
};

pub const UNSUPPORTED_CONDITION: ErrDef = ErrDef {
    status: StatusCode::NOT_ACCEPTABLE,
    title: "Unsupported Condition",
    code: "crudkit.query.unsupported_condition.v1",
};

pub const INVALID_PARAMETER: ErrDef = ErrDef {
    status: StatusCode::NOT_ACCEPTABLE,
    title: "Invalid Parameter",
    code: "crudkit.query.invalid_parameter.v1",
};

pub const IMMUTABLE_COLUMN: ErrDef = ErrDef {
    status: StatusCode::NOT_ACCEPTABLE,
    title: "Immutable Column",
    code: "crudkit.query.immutable_column.v1",
};

pub const INVALID_PAGE: ErrDef = ErrDef {
    status: StatusCode::UNPROCESSABLE_ENTITY,
    title: "Invalid Page",
    code: "crudkit.query.invalid_page.v1",
};
