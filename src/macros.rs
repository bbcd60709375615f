//! 宏与可变参数辅助。
//!
//! `predicate_pair!` 为条件构建器生成 AND / OR 成对的方法；
//! `IntoStrings` 让列名参数可以接受 `&str`、数组、切片或 `Vec`。

/// 生成一对谓词方法：`$and` 以 AND 追加，`$or` 以 OR 追加。
///
/// `$leaf` 是构造叶子表达式的私有方法，参数列表与生成的方法一致。
macro_rules! predicate_pair {
    ($(#[$doc:meta])* $and:ident, $or:ident => $leaf:ident($($p:ident : $t:ty),* $(,)?)) => {
        $(#[$doc])*
        pub fn $and(&mut self, $($p: $t),*) -> &mut Self {
            let leaf = self.$leaf($($p),*);
            self.push_leaf($crate::condition::Separator::And, leaf)
        }

        $(#[$doc])*
        pub fn $or(&mut self, $($p: $t),*) -> &mut Self {
            let leaf = self.$leaf($($p),*);
            self.push_leaf($crate::condition::Separator::Or, leaf)
        }
    };
}
pub(crate) use predicate_pair;

pub trait IntoStrings {
    fn extend_into_strings(self, dst: &mut Vec<String>);
}

impl IntoStrings for String {
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.push(self);
    }
}

impl IntoStrings for &str {
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.push(self.to_string());
    }
}

impl<const N: usize, T> IntoStrings for [T; N]
where
    T: Into<String>,
{
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.extend(self.into_iter().map(Into::into));
    }
}

impl<T> IntoStrings for &[T]
where
    T: Into<String> + Clone,
{
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.extend(self.iter().cloned().map(Into::into));
    }
}

impl<T> IntoStrings for Vec<T>
where
    T: Into<String>,
{
    fn extend_into_strings(self, dst: &mut Vec<String>) {
        dst.extend(self.into_iter().map(Into::into));
    }
}

/// 收集成 `Vec<String>`。
pub fn collect_into_strings<T>(value: T) -> Vec<String>
where
    T: IntoStrings,
{
    let mut dst = Vec::new();
    value.extend_into_strings(&mut dst);
    dst
}
