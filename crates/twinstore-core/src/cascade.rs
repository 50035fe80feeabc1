//! Referential cleanup on delete
//!
//! Neither store enforces `ON DELETE` actions, so the coordinator runs the
//! steps planned here in the same unit (or callback) as the delete itself,
//! before it.

use crate::model::catalog;
use crate::model::{EntitySpec, OnDelete};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeStep {
    pub child: &'static EntitySpec,
    pub column: &'static str,
    pub action: OnDelete,
}

/// Steps to run before deleting a row of `target`
pub fn plan_delete(target: &EntitySpec) -> Vec<CascadeStep> {
    catalog::referencing(target)
        .into_iter()
        .map(|(child, reference)| CascadeStep {
            child,
            column: reference.field,
            action: reference.on_delete,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::{CUSTOMER, EMPLOYEE, PRODUCT, SALES_ORDER};

    #[test]
    fn test_product_and_employee_cascade_orders() {
        for target in [&PRODUCT, &EMPLOYEE] {
            let plan = plan_delete(target);
            assert_eq!(plan.len(), 1);
            assert_eq!(plan[0].child.name, "sales_order");
            assert_eq!(plan[0].action, OnDelete::Cascade);
        }
    }

    #[test]
    fn test_customer_nulls_orders() {
        let plan = plan_delete(&CUSTOMER);
        assert_eq!(
            plan,
            vec![CascadeStep {
                child: &SALES_ORDER,
                column: "customer_id",
                action: OnDelete::SetNull,
            }]
        );
    }

    #[test]
    fn test_orders_have_no_dependents() {
        assert!(plan_delete(&SALES_ORDER).is_empty());
    }
}
