// regnames.rs - Named-group queries on a compiled program.

use crate::error::RegexError;
use crate::oniguruma::*;
use crate::regint::RegexType;

/// Every group name with its group numbers, in first-declaration order.
pub fn onig_names(reg: &RegexType) -> Vec<(&str, &[i32])> {
    reg.name_table
        .iter()
        .map(|e| (e.name.as_str(), e.back_refs.as_slice()))
        .collect()
}

pub fn onig_number_of_names(reg: &RegexType) -> usize {
    reg.name_table.len()
}

/// Group numbers declared with `name`, ascending.
pub fn onig_name_to_group_numbers<'a>(
    reg: &'a RegexType,
    name: &str,
) -> Result<&'a [i32], RegexError> {
    reg.name_table
        .find(name)
        .map(|e| e.back_refs.as_slice())
        .ok_or_else(|| RegexError::UndefinedName {
            name: name.to_string(),
        })
}

/// The group a back-reference to `name` resolves to: the last of its groups
/// that took part in `region`, or the last declared one.
pub fn onig_name_to_backref_number(
    reg: &RegexType,
    name: &str,
    region: Option<&OnigRegion>,
) -> Result<i32, RegexError> {
    let nums = onig_name_to_group_numbers(reg, name)?;
    if let Some(region) = region {
        if let Some(&n) = nums
            .iter()
            .rev()
            .find(|&&n| region.beg(n as usize) != ONIG_REGION_NOTPOS)
        {
            return Ok(n);
        }
    }
    nums.last()
        .copied()
        .ok_or_else(|| RegexError::UndefinedName {
            name: name.to_string(),
        })
}
