// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute and operator catalog for the visual condition builder.
//!
//! Presentation metadata only. The evaluator never consults it: operator
//! semantics are fixed regardless of the declared types below.

use serde::Serialize;

use crate::operator::Operator;

/// Declared type of a catalog attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
	String,
	Number,
	Boolean,
	Date,
	Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttributeDescriptor {
	pub path: &'static str,
	pub label: &'static str,
	pub data_type: DataType,
	/// Sample value or template shown as a placeholder.
	pub example: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperatorDescriptor {
	pub operator: Operator,
	pub label: &'static str,
	pub applies_to: &'static [DataType],
}

impl OperatorDescriptor {
	pub fn supports(&self, data_type: DataType) -> bool {
		self.applies_to.contains(&data_type)
	}
}

pub static ATTRIBUTES: &[AttributeDescriptor] = &[
	AttributeDescriptor {
		path: "user.id",
		label: "User ID",
		data_type: DataType::String,
		example: "{{resource.owner_id}}",
	},
	AttributeDescriptor {
		path: "user.type",
		label: "Subject type",
		data_type: DataType::String,
		example: "user",
	},
	AttributeDescriptor {
		path: "user.department",
		label: "Department",
		data_type: DataType::String,
		example: "finance",
	},
	AttributeDescriptor {
		path: "user.role",
		label: "Role",
		data_type: DataType::String,
		example: "manager",
	},
	AttributeDescriptor {
		path: "user.roles",
		label: "Roles",
		data_type: DataType::Array,
		example: "approver",
	},
	AttributeDescriptor {
		path: "user.level",
		label: "Seniority level",
		data_type: DataType::Number,
		example: "3",
	},
	AttributeDescriptor {
		path: "user.site_id",
		label: "Site",
		data_type: DataType::String,
		example: "{{resource.site_id}}",
	},
	AttributeDescriptor {
		path: "user.email",
		label: "Email",
		data_type: DataType::String,
		example: "@example\\.com$",
	},
	AttributeDescriptor {
		path: "user.is_active",
		label: "Active account",
		data_type: DataType::Boolean,
		example: "true",
	},
	AttributeDescriptor {
		path: "user.hire_date",
		label: "Hire date",
		data_type: DataType::Date,
		example: "2024-01-01",
	},
	AttributeDescriptor {
		path: "resource.type",
		label: "Resource type",
		data_type: DataType::String,
		example: "project",
	},
	AttributeDescriptor {
		path: "resource.id",
		label: "Resource ID",
		data_type: DataType::String,
		example: "42",
	},
	AttributeDescriptor {
		path: "resource.owner_id",
		label: "Owner",
		data_type: DataType::String,
		example: "{{user.id}}",
	},
	AttributeDescriptor {
		path: "resource.department",
		label: "Owning department",
		data_type: DataType::String,
		example: "{{user.department}}",
	},
	AttributeDescriptor {
		path: "resource.amount",
		label: "Amount",
		data_type: DataType::Number,
		example: "10000",
	},
	AttributeDescriptor {
		path: "resource.status",
		label: "Status",
		data_type: DataType::String,
		example: "pending",
	},
	AttributeDescriptor {
		path: "resource.site_id",
		label: "Site",
		data_type: DataType::String,
		example: "{{user.site_id}}",
	},
	AttributeDescriptor {
		path: "resource.created_at",
		label: "Created",
		data_type: DataType::Date,
		example: "2024-01-01",
	},
	AttributeDescriptor {
		path: "environment.hour",
		label: "Hour of day (UTC)",
		data_type: DataType::Number,
		example: "9",
	},
	AttributeDescriptor {
		path: "environment.day_of_week",
		label: "Day of week",
		data_type: DataType::String,
		example: "monday",
	},
	AttributeDescriptor {
		path: "environment.date",
		label: "Date",
		data_type: DataType::Date,
		example: "2024-12-31",
	},
	AttributeDescriptor {
		path: "environment.ip_address",
		label: "Client IP",
		data_type: DataType::String,
		example: "^10\\.",
	},
	AttributeDescriptor {
		path: "environment.is_business_hours",
		label: "Business hours",
		data_type: DataType::Boolean,
		example: "true",
	},
];

const ALL_TYPES: &[DataType] = &[
	DataType::String,
	DataType::Number,
	DataType::Boolean,
	DataType::Date,
	DataType::Array,
];
const ORDERED: &[DataType] = &[DataType::Number, DataType::Date];
const SCALAR: &[DataType] = &[DataType::String, DataType::Number, DataType::Date];
const TEXT: &[DataType] = &[DataType::String];

pub static OPERATORS: &[OperatorDescriptor] = &[
	OperatorDescriptor {
		operator: Operator::Equals,
		label: "equals",
		applies_to: ALL_TYPES,
	},
	OperatorDescriptor {
		operator: Operator::NotEquals,
		label: "does not equal",
		applies_to: ALL_TYPES,
	},
	OperatorDescriptor {
		operator: Operator::GreaterThan,
		label: "greater than",
		applies_to: ORDERED,
	},
	OperatorDescriptor {
		operator: Operator::LessThan,
		label: "less than",
		applies_to: ORDERED,
	},
	OperatorDescriptor {
		operator: Operator::GreaterThanOrEquals,
		label: "at least",
		applies_to: ORDERED,
	},
	OperatorDescriptor {
		operator: Operator::LessThanOrEquals,
		label: "at most",
		applies_to: ORDERED,
	},
	OperatorDescriptor {
		operator: Operator::In,
		label: "is one of",
		applies_to: SCALAR,
	},
	OperatorDescriptor {
		operator: Operator::NotIn,
		label: "is not one of",
		applies_to: SCALAR,
	},
	OperatorDescriptor {
		operator: Operator::Contains,
		label: "contains",
		applies_to: &[DataType::String, DataType::Array],
	},
	OperatorDescriptor {
		operator: Operator::StartsWith,
		label: "starts with",
		applies_to: TEXT,
	},
	OperatorDescriptor {
		operator: Operator::EndsWith,
		label: "ends with",
		applies_to: TEXT,
	},
	OperatorDescriptor {
		operator: Operator::Matches,
		label: "matches pattern",
		applies_to: TEXT,
	},
	OperatorDescriptor {
		operator: Operator::Between,
		label: "between",
		applies_to: ORDERED,
	},
];

pub fn attribute(path: &str) -> Option<&'static AttributeDescriptor> {
	ATTRIBUTES.iter().find(|a| a.path == path)
}

pub fn operator(op: Operator) -> Option<&'static OperatorDescriptor> {
	OPERATORS.iter().find(|d| d.operator == op)
}

pub fn operators_for(data_type: DataType) -> impl Iterator<Item = &'static OperatorDescriptor> {
	OPERATORS.iter().filter(move |d| d.supports(data_type))
}

/// The whole catalog, as served to the builder.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
	pub attributes: &'static [AttributeDescriptor],
	pub operators: &'static [OperatorDescriptor],
}

pub fn catalog() -> Catalog {
	Catalog {
		attributes: ATTRIBUTES,
		operators: OPERATORS,
	}
}
