use crate::combine::any::presence;
use crate::handle::future::Future;

/* Fixed-arity forms of the vec combinators, for inputs of differing types.
 * Tuples out, so no trait machinery: each arity is spelled out and built by
 * chaining, which also gives the same head-first failure order as all(). */

pub fn all2<A,B>(a: &Future<A>, b: &Future<B>) -> Future<(A,B)>
        where A: Clone + Send + 'static, B: Clone + Send + 'static {
    let b = b.clone();
    a.then_future(move |a| b.then(move |b| Ok((a,b))))
}

pub fn all3<A,B,C>(a: &Future<A>, b: &Future<B>, c: &Future<C>) -> Future<(A,B,C)>
        where A: Clone + Send + 'static, B: Clone + Send + 'static, C: Clone + Send + 'static {
    let c = c.clone();
    all2(a,b).then_future(move |(a,b)| c.then(move |c| Ok((a,b,c))))
}

pub fn all4<A,B,C,D>(a: &Future<A>, b: &Future<B>, c: &Future<C>, d: &Future<D>) -> Future<(A,B,C,D)>
        where A: Clone + Send + 'static, B: Clone + Send + 'static,
              C: Clone + Send + 'static, D: Clone + Send + 'static {
    let d = d.clone();
    all3(a,b,c).then_future(move |(a,b,c)| d.then(move |d| Ok((a,b,c,d))))
}

pub fn any2<A,B>(a: &Future<A>, b: &Future<B>) -> Future<(Option<A>,Option<B>)>
        where A: Clone + Send + 'static, B: Clone + Send + 'static {
    all2(&presence(a),&presence(b))
}

pub fn any3<A,B,C>(a: &Future<A>, b: &Future<B>, c: &Future<C>) -> Future<(Option<A>,Option<B>,Option<C>)>
        where A: Clone + Send + 'static, B: Clone + Send + 'static, C: Clone + Send + 'static {
    all3(&presence(a),&presence(b),&presence(c))
}

pub fn any4<A,B,C,D>(a: &Future<A>, b: &Future<B>, c: &Future<C>, d: &Future<D>)
        -> Future<(Option<A>,Option<B>,Option<C>,Option<D>)>
        where A: Clone + Send + 'static, B: Clone + Send + 'static,
              C: Clone + Send + 'static, D: Clone + Send + 'static {
    all4(&presence(a),&presence(b),&presence(c),&presence(d))
}

#[cfg(test)]
mod test {
    use anyhow::{ anyhow as err };
    use crate::error::FutureError;
    use crate::handle::promise::Promise;
    use super::*;

    #[test]
    pub fn test_all2_heterogeneous() {
        let a = Promise::new();
        let b = Promise::new();
        let combined = all2(&a.future(),&b.future());
        b.fulfill("two".to_string()).unwrap();
        a.fulfill(1).unwrap();
        assert_eq!((1,"two".to_string()),combined.get().unwrap());
    }

    #[test]
    pub fn test_all3_and_all4() {
        let combined = all3(&Future::settled(1),&Future::settled("x".to_string()),&Future::settled(3.5));
        assert_eq!((1,"x".to_string(),3.5),combined.get().unwrap());
        let combined = all4(&Future::settled(1),&Future::settled(2),&Future::settled(3),&Future::settled(4));
        assert_eq!((1,2,3,4),combined.get().unwrap());
    }

    #[test]
    pub fn test_all2_failure() {
        let a : Promise<u32> = Promise::new();
        let b = Promise::new();
        let combined = all2(&a.future(),&b.future());
        b.fulfill(2).unwrap();
        a.fail(err!("first broke")).unwrap();
        match combined.try_get() {
            Err(FutureError::Failed(fault)) => assert_eq!("first broke",format!("{}",fault)),
            other => panic!("unexpected {:?}",other)
        }
    }

    #[test]
    pub fn test_any2_mixed() {
        let a = Promise::new();
        let b : Promise<String> = Promise::new();
        let combined = any2(&a.future(),&b.future());
        a.fulfill(1).unwrap();
        b.fail(err!("no")).unwrap();
        assert_eq!((Some(1),None),combined.get().unwrap());
    }
}
