use std::collections::HashMap;

use crate::domain::employee::{Employee, EmployeeId, Role};
use crate::errors::ApprovalError;

/// Employees and their assigned managers.
#[derive(Clone, Debug, Default)]
pub struct OrgDirectory {
    employees: HashMap<EmployeeId, Employee>,
}

impl OrgDirectory {
    pub fn new(employees: Vec<Employee>) -> Result<Self, ApprovalError> {
        let mut directory = Self::default();
        for employee in employees {
            directory.upsert(employee)?;
        }
        Ok(directory)
    }

    pub fn upsert(&mut self, employee: Employee) -> Result<Option<Employee>, ApprovalError> {
        employee.validate()?;
        Ok(self.employees.insert(employee.id.clone(), employee))
    }

    pub fn get(&self, id: &EmployeeId) -> Option<&Employee> {
        self.employees.get(id)
    }

    pub fn remove(&mut self, id: &EmployeeId) -> Result<Employee, ApprovalError> {
        self.employees.remove(id).ok_or_else(|| ApprovalError::employee_not_found(id))
    }

    pub fn set_role(&mut self, id: &EmployeeId, role: Role) -> Result<&Employee, ApprovalError> {
        let employee =
            self.employees.get_mut(id).ok_or_else(|| ApprovalError::employee_not_found(id))?;
        employee.role = role;
        Ok(employee)
    }

    /// Direct manager, if the employee is known and has one assigned.
    pub fn manager_of(&self, id: &EmployeeId) -> Option<&EmployeeId> {
        self.employees.get(id).and_then(|employee| employee.manager.as_ref())
    }

    pub fn list(&self) -> Vec<Employee> {
        let mut employees: Vec<Employee> = self.employees.values().cloned().collect();
        employees.sort_by(|left, right| left.id.cmp(&right.id));
        employees
    }
}
