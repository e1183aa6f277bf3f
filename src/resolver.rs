//! Type name resolution against imports and a default package

/// Separator between package segments and the simple type name
pub const SEPARATOR: char = '.';

/// Data types emitted as-is when they appear as a field type
pub const DEFAULT_BUILTIN_TYPES: &[&str] = &[
    // Java primitives
    "boolean",
    "byte",
    "char",
    "short",
    "int",
    "long",
    "float",
    "double",
    // Boxed and common library types
    "Boolean",
    "Byte",
    "Character",
    "Short",
    "Integer",
    "Long",
    "Float",
    "Double",
    "String",
    "Object",
    "Comparable",
    "Date",
    "LocalDate",
    "LocalDateTime",
    "BigDecimal",
    "BigInteger",
    "Collection",
    "List",
    "Set",
    "Map",
    // Rule language data types
    "Numeric",
    "NumericInteger",
    "NumericLong",
    "NumericDouble",
    "NumericFloat",
    "NumericShort",
    "NumericByte",
    "NumericBigDecimal",
    "NumericBigInteger",
    "this",
];

/// Resolve a possibly-unqualified type name to a fully-qualified one.
///
/// Qualified names are returned unchanged. Otherwise the first import whose
/// simple name matches wins; failing that, the name is placed in
/// `package_name` (or returned as-is when there is no package).
pub fn resolve_type_name<S: AsRef<str>>(
    type_name: &str,
    imports: &[S],
    package_name: &str,
) -> String {
    if type_name.contains(SEPARATOR) {
        return type_name.to_string();
    }

    if let Some(import) = imports
        .iter()
        .map(AsRef::as_ref)
        .find(|import| import_matches(import, type_name))
    {
        return import.to_string();
    }

    if package_name.is_empty() {
        type_name.to_string()
    } else {
        format!("{}{}{}", package_name, SEPARATOR, type_name)
    }
}

/// Check whether an import provides `simple_name` (bounded at a separator)
fn import_matches(import: &str, simple_name: &str) -> bool {
    if import == simple_name {
        return true;
    }

    match import.strip_suffix(simple_name) {
        Some(prefix) => prefix.ends_with(SEPARATOR),
        None => false,
    }
}

/// Resolver bound to one model's imports, package and built-in types
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    imports: &'a [String],
    package_name: &'a str,
    builtin_types: &'a [String],
}

impl<'a> TypeResolver<'a> {
    pub fn new(imports: &'a [String], package_name: &'a str, builtin_types: &'a [String]) -> Self {
        Self {
            imports,
            package_name,
            builtin_types,
        }
    }

    /// Resolve a fact type name
    pub fn resolve(&self, type_name: &str) -> String {
        resolve_type_name(type_name, self.imports, self.package_name)
    }

    /// Resolve a field type, leaving built-in data types untouched
    pub fn resolve_field_type(&self, field_type: &str) -> String {
        if self.is_builtin(field_type) {
            field_type.to_string()
        } else {
            self.resolve(field_type)
        }
    }

    pub fn is_builtin(&self, type_name: &str) -> bool {
        self.builtin_types.iter().any(|builtin| builtin == type_name)
    }
}
