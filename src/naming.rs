//! Naming conventions shared by the scanners and builders.

use convert_case::{Case, Casing};

/// Best-effort singularization for common English plurals
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => word.to_string(),
    }
}

/// Default entity property an association hydrates into, e.g. `Departments` ->
/// `department` for a single target and `departments` for a collection
pub fn association_property(alias: &str, collection: bool) -> String {
    let snake = alias.to_case(Case::Snake);
    if collection {
        snake
    } else {
        singularize(&snake)
    }
}

/// Operation id for a controller action, e.g. `EmployeeSalaries` + `index` ->
/// `employeeSalaries:index`
pub fn operation_id(controller: &str, action: &str) -> String {
    format!("{}:{}", controller.to_case(Case::Camel), action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("employees"), "employee");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("glass"), "glass");
    }

    #[test]
    fn test_association_property() {
        assert_eq!(association_property("Departments", false), "department");
        assert_eq!(association_property("DepartmentEmployees", true), "department_employees");
    }

    #[test]
    fn test_operation_id() {
        assert_eq!(operation_id("Employees", "search"), "employees:search");
        assert_eq!(operation_id("EmployeeSalaries", "index"), "employeeSalaries:index");
    }
}
