//! Expands parameters with several admissible types into one constructor
//! signature per combination.

use tracing::debug;

use crate::errors::{GenError, GenResult};
use crate::parser::method::ParameterDescriptor;
use crate::parser::type_descriptor::TypeId;
use crate::schema_resolver::SchemaResolver;

/// Positional numeral system where slot `i` counts up to `radices[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixedRadix {
    radices: Vec<usize>,
}

impl MixedRadix {
    pub fn new(radices: Vec<usize>) -> Self {
        MixedRadix { radices }
    }

    /// Number of tuples the odometer visits.
    pub fn total(&self) -> usize {
        self.radices.iter().product()
    }

    /// Every digit tuple, slot 0 varying fastest. Each call starts over.
    pub fn iter(&self) -> Combinations<'_> {
        let exhausted = self.radices.iter().any(|radix| *radix == 0);
        Combinations {
            radices: &self.radices,
            digits: if exhausted { None } else { Some(vec![0; self.radices.len()]) },
        }
    }
}

/// Increments `digits` by one, carrying toward higher slots. Returns `false`
/// once the carry leaves the last slot, i.e. every tuple has been produced.
pub fn advance(digits: &mut [usize], radices: &[usize]) -> bool {
    for (digit, radix) in digits.iter_mut().zip(radices) {
        *digit += 1;
        if *digit < *radix {
            return true;
        }
        *digit = 0;
    }
    false
}

pub struct Combinations<'a> {
    radices: &'a [usize],
    digits: Option<Vec<usize>>,
}

impl Iterator for Combinations<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.digits.take()?;
        let mut following = current.clone();
        if advance(&mut following, self.radices) {
            self.digits = Some(following);
        }
        Some(current)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureArg {
    pub name: String,
    pub type_id: TypeId,
    pub is_array: bool,
}

/// One constructor: an ordered choice of type per parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorSignature {
    pub args: Vec<SignatureArg>,
}

impl ConstructorSignature {
    pub fn trailing_array(&self) -> Option<&SignatureArg> {
        self.args.last().filter(|arg| arg.is_array)
    }
}

/// One signature per combination of parameter alternatives. The array-typed
/// argument, if any, is moved to the end so it can be rendered as varargs.
pub fn constructor_signatures(
    resolver: &SchemaResolver,
    method: &str,
    parameters: &[ParameterDescriptor],
) -> GenResult<Vec<ConstructorSignature>> {
    let odometer = MixedRadix::new(parameters.iter().map(|p| p.type_alternatives.len()).collect());
    debug!(method, combinations = odometer.total(), "expanding constructor signatures");

    let mut signatures = Vec::with_capacity(odometer.total());
    for digits in odometer.iter() {
        let mut args = Vec::with_capacity(parameters.len());
        let mut array_arg: Option<SignatureArg> = None;
        for (parameter, choice) in parameters.iter().zip(digits) {
            let type_id = parameter.type_alternatives[choice];
            let arg = SignatureArg {
                name: parameter.name.clone(),
                type_id,
                is_array: resolver.is_array(type_id)?,
            };
            if !arg.is_array {
                args.push(arg);
                continue;
            }
            if let Some(previous) = &array_arg {
                return Err(GenError::unsupported(
                    method,
                    format!(
                        "more than one array argument in one constructor ({} and {})",
                        previous.name, arg.name
                    ),
                ));
            }
            array_arg = Some(arg);
        }
        args.extend(array_arg);
        signatures.push(ConstructorSignature { args });
    }
    Ok(signatures)
}
