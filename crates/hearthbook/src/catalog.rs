//! The household finance catalog.
//!
//! Two namespaces: `income` holds employment and pay, `equity` holds loans,
//! taxes and account ledgers. Tables are listed in the order they were first
//! modeled, not in creation order; the solver sorts out dependencies.

use crate::Result;
use hearthbook_schema::{Catalog, CheckDef, ColumnDef, PgType, TableDef};
use PgType::{Date, Integer, Numeric, Text};

pub const INCOME: &str = "income";
pub const EQUITY: &str = "equity";

/// Namespaces the household catalog lives in.
pub const NAMESPACES: &[&str] = &[INCOME, EQUITY];

const EMPLOYER: &[ColumnDef] = &[
    ColumnDef::id("id"),
    ColumnDef::new("employer_name", Text),
    ColumnDef::new("employer_identification_number", Text),
    ColumnDef::new("employer_control_number", Text),
    ColumnDef::new("employer_state_id", Text),
    ColumnDef::new("employer_address", Text),
    ColumnDef::new("employer_address_cont", Text),
    ColumnDef::new("employer_city", Text),
    ColumnDef::new("employer_state", Text),
    ColumnDef::new("employer_zip_code", Text),
];

const SELF_EMPLOYMENT: &[ColumnDef] = &[
    ColumnDef::id("id"),
    ColumnDef::new("business_name", Text),
    ColumnDef::new("business_identification_number", Text),
    ColumnDef::new("business_address", Text),
    ColumnDef::new("business_address_cont", Text),
    ColumnDef::new("business_city", Text),
    ColumnDef::new("business_state", Text),
    ColumnDef::new("business_zip_code", Text),
];

const PAYSTUB: &[ColumnDef] = &[
    ColumnDef::id("id"),
    ColumnDef::fk("employer_id", Integer, "income.employer.id"),
    ColumnDef::fk("self_employment_id", Integer, "income.self_employment.id"),
    ColumnDef::new("period_beginning", Date),
    ColumnDef::new("period_ending", Date),
    ColumnDef::new("pay_date", Date),
    ColumnDef::new("pay_rate", Numeric),
    ColumnDef::new("hours", Numeric),
    ColumnDef::new("bonus", Numeric),
    ColumnDef::new("commission", Numeric),
    ColumnDef::new("gross_pay", Numeric),
    ColumnDef::new("net_pay", Numeric),
    ColumnDef::new("deductions", Numeric),
    ColumnDef::new("gross_pay_ytd", Numeric),
    ColumnDef::new("net_pay_ytd", Numeric),
    ColumnDef::new("deductions_ytd", Numeric),
];

/// A paystub is issued by an employer or by a self-employment, never both.
const PAYSTUB_CHECKS: &[CheckDef] = &[CheckDef {
    name: "paystub_single_source",
    expr: "(employer_id IS NULL) <> (self_employment_id IS NULL)",
}];

const DEDUCTION: &[ColumnDef] = &[
    ColumnDef::id("id"),
    ColumnDef::fk("paystub_id", Integer, "income.paystub.id"),
    ColumnDef::new("federal_income_tax", Numeric),
    ColumnDef::new("social_security_tax", Numeric),
    ColumnDef::new("medicare_tax", Numeric),
    ColumnDef::new("state_income_tax", Numeric),
    ColumnDef::new("client_roth", Numeric),
    ColumnDef::new("client_401k", Numeric),
    ColumnDef::new("health_spending_account", Numeric),
    ColumnDef::new("medical", Numeric),
    ColumnDef::new("dental", Numeric),
    ColumnDef::new("vision", Numeric),
];

/// Loans paid down on a fixed schedule.
const AMORTIZED: &[ColumnDef] = &[
    ColumnDef::id("id"),
    // Lenders aren't modeled, so this is a plain number.
    ColumnDef::new("lender_id", Integer),
    ColumnDef::new("lender_name", Text),
    ColumnDef::new("billed_amount", Numeric),
    ColumnDef::new("interest_rate", Numeric),
    ColumnDef::new("term_length", Integer),
    ColumnDef::new("monthly_payment", Numeric),
    ColumnDef::new("additional_payments", Numeric),
    ColumnDef::new("remaining_amount", Numeric),
    ColumnDef::new("est_payoff_date", Date),
];

/// Open-ended credit: no term, no payoff date.
const REVOLVING: &[ColumnDef] = &[
    ColumnDef::id("id"),
    ColumnDef::new("lender_id", Integer),
    ColumnDef::new("lender_name", Text),
    ColumnDef::new("billed_amount", Numeric),
    ColumnDef::new("interest_rate", Numeric),
    ColumnDef::new("monthly_payment", Numeric),
    ColumnDef::new("additional_payments", Numeric),
    ColumnDef::new("remaining_amount", Numeric),
];

const ASSESSED: &[ColumnDef] = &[
    ColumnDef::id("id"),
    ColumnDef::new("entity", Text),
    ColumnDef::new("item", Text),
    ColumnDef::new("amount", Numeric),
    ColumnDef::new("date", Date),
    ColumnDef::new("due_date", Date),
];

const WITHHOLDING: &[ColumnDef] = &[
    ColumnDef::id("id"),
    ColumnDef::fk("paystub_w2_id", Integer, "income.paystub.id"),
];

const CAPITAL_GAIN: &[ColumnDef] = &[
    ColumnDef::id("id"),
    ColumnDef::fk("stock_bond_id", Integer, "equity.stock.id"),
];

const LEDGER: &[ColumnDef] = &[
    ColumnDef::id("id"),
    ColumnDef::new("date", Date),
    ColumnDef::new("deposits", Numeric),
    ColumnDef::new("withdrawal", Numeric),
    ColumnDef::new("balance", Numeric),
    ColumnDef::new("margin", Numeric),
];

const fn table(
    namespace: &'static str,
    name: &'static str,
    doc: &'static str,
    columns: &'static [ColumnDef],
) -> TableDef {
    TableDef {
        namespace,
        name,
        doc,
        columns,
        checks: &[],
    }
}

/// Every household table.
pub const HOUSEHOLD_TABLES: &[TableDef] = &[
    table(INCOME, "employer", "An organization that employs a household member.", EMPLOYER),
    table(INCOME, "self_employment", "A business run by a household member.", SELF_EMPLOYMENT),
    TableDef {
        namespace: INCOME,
        name: "paystub",
        doc: "One pay period's earnings from a single source.",
        columns: PAYSTUB,
        checks: PAYSTUB_CHECKS,
    },
    table(INCOME, "deduction", "Itemized deductions taken from a paystub.", DEDUCTION),
    table(EQUITY, "car_loan", "An auto loan.", AMORTIZED),
    table(EQUITY, "home_loan", "A mortgage.", AMORTIZED),
    table(EQUITY, "personal_loan", "An unsecured installment loan.", AMORTIZED),
    table(EQUITY, "credit_loan", "A credit card or line of credit.", REVOLVING),
    table(EQUITY, "real_estate_tax", "A property tax assessment on real estate.", ASSESSED),
    table(
        EQUITY,
        "personal_property_tax",
        "A tax assessment on personal property such as vehicles.",
        ASSESSED,
    ),
    table(EQUITY, "federal_tax", "Federal withholding tied to a W-2 paystub.", WITHHOLDING),
    table(EQUITY, "state_tax", "State withholding tied to a W-2 paystub.", WITHHOLDING),
    table(EQUITY, "capital_gain_tax", "Tax owed on a realized gain.", CAPITAL_GAIN),
    table(EQUITY, "savings", "Savings account activity.", LEDGER),
    table(EQUITY, "stock", "Brokerage account activity in stocks.", LEDGER),
    table(EQUITY, "bond", "Brokerage account activity in bonds.", LEDGER),
    table(EQUITY, "retirement_401k", "401(k) account activity.", LEDGER),
    table(EQUITY, "roth", "Roth IRA account activity.", LEDGER),
];

/// The household catalog, lowered and ready to plan.
pub fn household() -> Result<Catalog> {
    lower(HOUSEHOLD_TABLES)
}

/// Lower static descriptors into a catalog.
pub fn lower(defs: &[TableDef]) -> Result<Catalog> {
    Ok(Catalog::from_defs(defs)?)
}
