mod coupon_code;

pub use coupon_code::*;
