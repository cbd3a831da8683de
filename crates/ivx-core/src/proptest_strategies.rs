use crate::{AxisSpec, DType, Literal, Shape, Tensor};
use proptest::prelude::*;

pub fn arb_dtype() -> impl Strategy<Value = DType> {
    proptest::sample::select(DType::ALL.to_vec())
}

pub fn arb_literal() -> impl Strategy<Value = Literal> {
    prop_oneof![
        any::<i64>().prop_map(Literal::I64),
        any::<bool>().prop_map(Literal::Bool),
        prop::num::f64::NORMAL.prop_map(Literal::from_f64),
    ]
}

pub fn arb_shape() -> impl Strategy<Value = Shape> {
    prop::collection::vec(0..=4u32, 0..=3).prop_map(Shape::new)
}

pub fn arb_tensor() -> impl Strategy<Value = Tensor> {
    (arb_dtype(), arb_shape()).prop_flat_map(|(dtype, shape)| {
        let count = shape.element_count().unwrap_or(0) as usize;
        prop::collection::vec(-100.0..100.0f64, count).prop_map(move |values| {
            let elements = values.into_iter().map(Literal::from_f64).collect();
            Tensor::new(dtype, shape.clone(), elements).expect("strategy builds consistent tensors")
        })
    })
}

pub fn arb_axis_spec(rank: usize) -> impl Strategy<Value = AxisSpec> {
    let rank = rank as i64;
    prop_oneof![
        Just(AxisSpec::All),
        (-rank.max(1)..rank.max(1)).prop_map(AxisSpec::Single),
        prop::collection::vec(-rank.max(1)..rank.max(1), 0..=2).prop_map(AxisSpec::Many),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn cast_is_idempotent(dtype in arb_dtype(), literal in arb_literal()) {
            let once = dtype.cast_literal(literal);
            prop_assert_eq!(dtype.cast_literal(once), once);
        }

        #[test]
        fn generated_tensors_match_their_shape(tensor in arb_tensor()) {
            prop_assert_eq!(
                tensor.len() as u64,
                tensor.shape.element_count().unwrap_or(0)
            );
        }

        #[test]
        fn cast_to_own_dtype_is_identity(tensor in arb_tensor()) {
            prop_assert_eq!(tensor.cast(tensor.dtype), tensor);
        }

        #[test]
        fn axis_specs_are_serializable(spec in arb_axis_spec(3)) {
            let json = serde_json::to_string(&spec).expect("serialize");
            let back: AxisSpec = serde_json::from_str(&json).expect("deserialize");
            prop_assert_eq!(back, spec);
        }
    }
}
