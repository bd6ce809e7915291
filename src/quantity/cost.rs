quantity!(
    /// Amount of money over some period, in the billing currency.
    Cost, suffix: "", precision: 2
);
