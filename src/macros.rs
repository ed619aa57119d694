pub use enclose::*;

#[macro_export]
macro_rules! computed {
    (( $($d_tt:tt)* ) $ctx:ident => $($b:tt)*) => {
        $crate::Computed::new($crate::macros::enclose!(($( $d_tt )*) move |$ctx: &$crate::Evaluation| { $($b)* }))
    };
    ($ctx:ident => $($b:tt)*) => {
        $crate::Computed::new(move |$ctx: &$crate::Evaluation| { $($b)* })
    };
}

#[macro_export]
macro_rules! effect {
    (( $($d_tt:tt)* ) $ctx:ident => $($b:tt)*) => {
        $crate::Effect::new($crate::macros::enclose!(($( $d_tt )*) move |$ctx: &$crate::Evaluation| { $($b)* }))
    };
    ($ctx:ident => $($b:tt)*) => {
        $crate::Effect::new(move |$ctx: &$crate::Evaluation| { $($b)* })
    };
}

#[macro_export]
macro_rules! batch {
    ($($b:tt)*) => {
        $crate::batch(move || { $($b)* })
    };
}
